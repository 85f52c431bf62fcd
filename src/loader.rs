//! Background scene loading.
//!
//! Parsing and classifying a large GLB takes a while, so it runs on its own
//! thread. The result is published once over a channel; until then the
//! session walks against an empty scene.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

use crate::classify::ClassificationRules;
use crate::geometry::{LoadedScene, SceneLoadError};
use crate::scene::SceneWorld;

/// A fully loaded and classified scene.
pub struct SceneAsset {
    /// Source geometry, for GPU upload.
    pub geometry: LoadedScene,
    /// Classified entities, for collision and targeting.
    pub world: SceneWorld,
}

impl SceneAsset {
    /// Load and classify synchronously.
    pub fn load(path: &std::path::Path, rules: &ClassificationRules) -> Result<Self, SceneLoadError> {
        let geometry = LoadedScene::from_file(path)?;

        let (min, max) = geometry.bounds();
        let size = max - min;
        let center = (min + max) * 0.5;
        log::info!("Model size: X:{:.2} Y:{:.2} Z:{:.2}", size.x, size.y, size.z);
        log::info!("Model center: X:{:.2} Y:{:.2} Z:{:.2}", center.x, center.y, center.z);

        let world = SceneWorld::build(&geometry, rules);
        Ok(Self { geometry, world })
    }
}

/// Handle to a scene loading on a background thread.
pub struct SceneLoader {
    receiver: Option<Receiver<Result<SceneAsset, SceneLoadError>>>,
    failed: Option<SceneLoadError>,
}

impl SceneLoader {
    /// Start loading `path` on a new thread.
    pub fn spawn(path: PathBuf, rules: ClassificationRules) -> Self {
        let (sender, receiver) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("scene-loader".to_string())
            .spawn(move || {
                let started = Instant::now();
                log::info!("Loading {}", path.display());
                let result = SceneAsset::load(&path, &rules);
                if result.is_ok() {
                    log::info!("Loaded {} in {:.2?}", path.display(), started.elapsed());
                }
                // The receiver may be gone if the window closed mid-load.
                let _ = sender.send(result);
            });

        match spawned {
            Ok(_) => Self::from_receiver(receiver),
            Err(err) => Self {
                receiver: None,
                failed: Some(SceneLoadError::Spawn(err)),
            },
        }
    }

    fn from_receiver(receiver: Receiver<Result<SceneAsset, SceneLoadError>>) -> Self {
        Self {
            receiver: Some(receiver),
            failed: None,
        }
    }

    /// Take the result if loading has finished. Yields at most once, and
    /// yields an error if the thread never started or died without sending.
    pub fn poll(&mut self) -> Option<Result<SceneAsset, SceneLoadError>> {
        if let Some(err) = self.failed.take() {
            return Some(Err(err));
        }

        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(SceneLoadError::LoaderExited))
            }
        }
    }

    /// True while a result is still expected.
    pub fn is_pending(&self) -> bool {
        self.receiver.is_some() || self.failed.is_some()
    }
}
