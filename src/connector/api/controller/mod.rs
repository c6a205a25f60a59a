pub mod ask_controller;
pub mod clear_controller;
pub mod populate_controller;
pub mod search_controller;
pub mod stats_controller;

pub use ask_controller::AskController;
pub use clear_controller::ClearController;
pub use populate_controller::PopulateController;
pub use search_controller::SearchController;
pub use stats_controller::StatsController;
