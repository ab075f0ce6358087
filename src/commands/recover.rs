//! Implementation of `corral recover`.

use crate::config::Config;
use crate::error::Result;
use crate::events::EventLog;
use crate::registry::RegistryStore;

pub fn cmd_recover(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).or_else(|_| -> Result<Config> { Ok(Config::default()) })?;
    let store = RegistryStore::new(&config.data_dir);
    let events = EventLog::new(config.event_log_capacity);

    crate::recovery::run(&store, &events)?;

    println!("Recovery complete.");
    for event in events.snapshot() {
        println!("  {}", event.message);
    }

    Ok(())
}
