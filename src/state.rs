use crate::assets::{self, Snippet};
use crate::config::{MountError, MountTable, Settings};
use crate::templates::{RenderError, Renderer};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid mount configuration: {0}")]
    Mounts(#[from] MountError),
    #[error("invalid templates: {0}")]
    Templates(#[from] RenderError),
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub mounts: Arc<MountTable>,
    pub renderer: Arc<Renderer>,
    pub snippets: Arc<Vec<Snippet>>,
}

impl AppState {
    pub fn from_settings(settings: Settings) -> Result<Self, StartupError> {
        let mounts = MountTable::from_settings(&settings)?;
        let renderer = Renderer::new(settings.templates_dir.as_deref())?;

        for mount in mounts.iter() {
            renderer.validate(&mount.templates)?;
            if !mount.has_source_dir() {
                warn!(
                    "Mount \"{}\" has no source directory; requests to it will fail",
                    mount.mount_id
                );
                continue;
            }
            if let Some(dir) = &mount.source_dir {
                if dir.is_dir() {
                    info!("Mount /{} -> {:?}", mount.mount_id, dir);
                } else {
                    warn!(
                        "Source directory for mount \"{}\" does not exist: {:?}",
                        mount.mount_id, dir
                    );
                }
            }
        }

        let mut snippets = Vec::new();
        if settings.font_awesome {
            snippets.push(assets::font_awesome());
        }

        Ok(Self {
            settings,
            mounts: Arc::new(mounts),
            renderer: Arc::new(renderer),
            snippets: Arc::new(snippets),
        })
    }
}
