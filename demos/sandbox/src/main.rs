// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use clap::Parser;
use khora_locator::template::{self, LocatorTemplate};
use khora_locator::{LocatorConfig, ServiceRegistry, Subsystem, SystemRegistry};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Boots the service locator and runs a few lookups against it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Locator configuration file (RON). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

trait AudioSystem: Send + Sync {
    fn play(&self, clip: &str);
}

trait SaveSystem: Send + Sync {
    fn save(&self) -> u32;
}

trait InputSystem: Send + Sync {
    fn bindings(&self) -> usize;
}

struct Mixer {
    device: String,
}

impl AudioSystem for Mixer {
    fn play(&self, clip: &str) {
        log::info!("[{}] playing '{}'", self.device, clip);
    }
}

#[derive(Default)]
struct SlotSaver {
    saves: AtomicU32,
}

impl SaveSystem for SlotSaver {
    fn save(&self) -> u32 {
        self.saves.fetch_add(1, Ordering::Relaxed) + 1
    }
}

struct Keyboard;

impl InputSystem for Keyboard {
    fn bindings(&self) -> usize {
        104
    }
}

fn register_templates(config: &LocatorConfig) {
    template::global().register(config.template.clone(), {
        let name = config.template.clone();
        move || {
            LocatorTemplate::new(name.clone()).with_child(
                Subsystem::builder("Input")
                    .provide::<dyn InputSystem>(Arc::new(Keyboard))
                    .build(),
            )
        }
    });
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => LocatorConfig::load(path)?,
        None => LocatorConfig::default(),
    };

    Builder::from_env(Env::default().default_filter_or(config.log_filter.as_str())).init();

    register_templates(&config);
    let systems = SystemRegistry::bootstrap(&config)?;
    let services = ServiceRegistry::bootstrap(&config)?;

    // The engine owns its subsystems; the registries only see them.
    let audio = Subsystem::builder("Audio")
        .provide::<dyn AudioSystem>(Arc::new(Mixer {
            device: "default".to_string(),
        }))
        .build();
    let saves = Subsystem::builder("Saves")
        .provide::<dyn SaveSystem>(Arc::new(SlotSaver::default()))
        .build();

    services.write().register::<dyn AudioSystem>(&audio);
    // Rejected with a warning, the first registration stays.
    services.write().register::<dyn AudioSystem>(&audio);
    systems.write().add(&saves);

    if let Some(mixer) = services.read().get::<dyn AudioSystem>() {
        mixer.play("menu_theme.ogg");
    }
    if let Some(saver) = systems.read().get::<dyn SaveSystem>() {
        log::info!("Saved game #{}", saver.save());
    }
    if let Some(input) = systems.read().get::<dyn InputSystem>() {
        log::info!("Input bound {} keys", input.bindings());
    }

    systems.on_context_transition();
    services.on_context_transition();

    systems.write().remove(&saves);
    if systems.read().get::<dyn SaveSystem>().is_none() {
        log::info!("Save system retired.");
    }

    Ok(())
}
