use anyhow::Result;

use super::super::Container;

pub struct ClearController<'a> {
    container: &'a Container,
}

impl<'a> ClearController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn clear(&self) -> Result<String> {
        let removed = self.container.clear_use_case().execute().await?;
        Ok(format!("Removed {} documents.", removed))
    }
}
