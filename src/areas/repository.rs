use crate::areas::database::Database;
use crate::config::StoreConfig;
use std::cell::{RefCell, RefMut};
use std::path::Path;

pub struct Repository {
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    config: StoreConfig,
}

impl Repository {
    pub fn new(config: StoreConfig, writer: Box<dyn std::io::Write>) -> Self {
        let database = Database::open(&config);

        Repository {
            writer: RefCell::new(writer),
            database,
            config,
        }
    }

    pub fn git_dir(&self) -> &Path {
        self.config.git_dir()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}
