use crate::Position;
use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_DIR: &str = "schemaview";
const SETTINGS_FILE: &str = "layout.json";

/// Tuning constants for all placers. Every field has a default, so a settings
/// file only needs to name the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub grid: GridSettings,
    pub hierarchical: HierarchicalSettings,
    pub force: ForceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub start_x: f64,
    pub start_y: f64,
    pub spacing_x: f64,
    pub spacing_y: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            start_x: 100.0,
            start_y: 80.0,
            spacing_x: 380.0,
            spacing_y: 320.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalSettings {
    pub start_x: f64,
    pub start_y: f64,
    pub horizontal_spacing: f64,
    pub level_height: f64,
    /// Width each level is centered within.
    pub canvas_width: f64,
    /// Let many-to-many relationships order levels too (source depends on target).
    pub many_to_many_dependencies: bool,
}

impl Default for HierarchicalSettings {
    fn default() -> Self {
        Self {
            start_x: 100.0,
            start_y: 80.0,
            horizontal_spacing: 380.0,
            level_height: 320.0,
            canvas_width: 1200.0,
            many_to_many_dependencies: false,
        }
    }
}

/// Box new nodes are scattered into before the simulation starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for SeedBounds {
    fn default() -> Self {
        Self {
            min_x: 100.0,
            max_x: 900.0,
            min_y: 100.0,
            max_y: 700.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceSettings {
    pub iterations: usize,
    pub repulsion: f64,
    pub spring_length: f64,
    pub spring_strength: f64,
    pub center: Position,
    pub center_force: f64,
    pub damping: f64,
    pub seed_bounds: SeedBounds,
    /// Fixed seed for placing new nodes. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            repulsion: 8000.0,
            spring_length: 280.0,
            spring_strength: 0.01,
            center: Position::new(600.0, 400.0),
            center_force: 0.01,
            damping: 0.9,
            seed_bounds: SeedBounds::default(),
            seed: None,
        }
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::invalid(field, format!("{value} is not finite")))
    }
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), SettingsError> {
    ensure_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::invalid(field, format!("{value} must be > 0")))
    }
}

impl LayoutSettings {
    /// Path of the per-user settings file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the per-user settings file, falling back to defaults when it is
    /// missing or unusable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::debug!("No config directory available, using default layout settings");
            return Self::default();
        };
        if !path.exists() {
            tracing::debug!("Layout settings not found at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load(&path) {
            Ok(settings) => {
                tracing::info!("Layout settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::error!("Ignoring layout settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let grid = &self.grid;
        ensure_finite("grid.start_x", grid.start_x)?;
        ensure_finite("grid.start_y", grid.start_y)?;
        ensure_positive("grid.spacing_x", grid.spacing_x)?;
        ensure_positive("grid.spacing_y", grid.spacing_y)?;

        let hier = &self.hierarchical;
        ensure_finite("hierarchical.start_x", hier.start_x)?;
        ensure_finite("hierarchical.start_y", hier.start_y)?;
        ensure_positive("hierarchical.horizontal_spacing", hier.horizontal_spacing)?;
        ensure_positive("hierarchical.level_height", hier.level_height)?;
        ensure_positive("hierarchical.canvas_width", hier.canvas_width)?;

        let force = &self.force;
        if force.iterations == 0 {
            return Err(SettingsError::invalid("force.iterations", "must be at least 1"));
        }
        ensure_finite("force.repulsion", force.repulsion)?;
        ensure_finite("force.spring_length", force.spring_length)?;
        ensure_finite("force.spring_strength", force.spring_strength)?;
        ensure_finite("force.center.x", force.center.x)?;
        ensure_finite("force.center.y", force.center.y)?;
        ensure_finite("force.center_force", force.center_force)?;
        ensure_finite("force.damping", force.damping)?;
        if !(0.0..=1.0).contains(&force.damping) {
            return Err(SettingsError::invalid(
                "force.damping",
                format!("{} is outside [0, 1]", force.damping),
            ));
        }

        let bounds = &force.seed_bounds;
        for (field, value) in [
            ("force.seed_bounds.min_x", bounds.min_x),
            ("force.seed_bounds.max_x", bounds.max_x),
            ("force.seed_bounds.min_y", bounds.min_y),
            ("force.seed_bounds.max_y", bounds.max_y),
        ] {
            ensure_finite(field, value)?;
        }
        if bounds.min_x > bounds.max_x || bounds.min_y > bounds.max_y {
            return Err(SettingsError::invalid(
                "force.seed_bounds",
                "minimum exceeds maximum",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = LayoutSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.grid.spacing_x, 380.0);
        assert_eq!(settings.hierarchical.canvas_width, 1200.0);
        assert_eq!(settings.force.iterations, 100);
        assert_eq!(settings.force.seed, None);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let settings: LayoutSettings =
            serde_json::from_str(r#"{"grid":{"spacing_x":200.0},"force":{"seed":7}}"#).unwrap();
        assert_eq!(settings.grid.spacing_x, 200.0);
        assert_eq!(settings.grid.spacing_y, 320.0);
        assert_eq!(settings.force.seed, Some(7));
        assert_eq!(settings.hierarchical, HierarchicalSettings::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = LayoutSettings::default();
        settings.force.damping = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid {
                field: "force.damping",
                ..
            })
        ));

        let mut settings = LayoutSettings::default();
        settings.grid.spacing_x = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = LayoutSettings::default();
        settings.force.iterations = 0;
        assert!(settings.validate().is_err());

        let mut settings = LayoutSettings::default();
        settings.force.seed_bounds.min_x = 1000.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("layout.json");

        let mut settings = LayoutSettings::default();
        settings.hierarchical.many_to_many_dependencies = true;
        settings.force.seed = Some(42);
        settings.save(&path).unwrap();

        let loaded = LayoutSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_reports_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            LayoutSettings::load(&missing),
            Err(SettingsError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            LayoutSettings::load(&broken),
            Err(SettingsError::Parse(_))
        ));
    }
}
