use std::path::PathBuf;

use anyhow::Result;

use crate::application::PopulationReport;

use super::super::Container;

pub struct PopulateController<'a> {
    container: &'a Container,
}

impl<'a> PopulateController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn populate(&self, catalog: PathBuf, fresh: bool) -> Result<String> {
        let use_case = self.container.populate_use_case(&catalog, true)?;
        let report = use_case.execute(fresh).await?;
        Ok(self.format_report(&report))
    }

    fn format_report(&self, report: &PopulationReport) -> String {
        format!(
            "Successfully populated {} documents ({} dimensions) in {:.2}s",
            report.documents,
            report.dimensions,
            report.elapsed.as_secs_f64()
        )
    }
}
