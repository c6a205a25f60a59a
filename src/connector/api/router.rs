use anyhow::{bail, Result};

use crate::Commands;

use super::container::Container;
use super::controller::{
    AskController, ClearController, PopulateController, SearchController, StatsController,
};

pub struct Router<'a> {
    populate_controller: PopulateController<'a>,
    clear_controller: ClearController<'a>,
    search_controller: SearchController<'a>,
    ask_controller: AskController<'a>,
    stats_controller: StatsController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            populate_controller: PopulateController::new(container),
            clear_controller: ClearController::new(container),
            search_controller: SearchController::new(container),
            ask_controller: AskController::new(container),
            stats_controller: StatsController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Populate { catalog, fresh } => {
                self.populate_controller.populate(catalog, fresh).await
            }
            Commands::Clear => self.clear_controller.clear().await,
            Commands::Search {
                query,
                num,
                threshold,
            } => self.search_controller.search(query, num, threshold).await,
            Commands::Ask { question } => self.ask_controller.ask(question).await,
            Commands::Stats => self.stats_controller.stats().await,
            Commands::Converse { .. } | Commands::Serve { .. } => {
                bail!("long-running commands are not routed; run them through main")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::api::container::ContainerConfig;

    async fn mock_container() -> Container {
        let config = ContainerConfig {
            mock_services: true,
            memory_storage: true,
            ..ContainerConfig::default()
        };
        Container::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn long_running_commands_are_rejected() {
        let container = mock_container().await;
        let router = Router::new(&container);

        let err = router
            .route(Commands::Serve {
                port: 0,
                public: false,
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not routed"));
    }

    #[tokio::test]
    async fn stats_route_reports_empty_index() {
        let container = mock_container().await;
        let router = Router::new(&container);

        let output = router.route(Commands::Stats).await.unwrap();
        assert!(output.contains("Documents:  0"));
    }
}
