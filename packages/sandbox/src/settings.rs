// ABOUTME: Render pipeline settings shared by every stage of a sandbox run
// ABOUTME: Holds the scene file name, render and install commands, and artifact search rules

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    // Source placement
    pub scene_file: String,

    // Render invocation
    pub render_program: String,
    /// Low quality, fast render
    pub quality_flag: String,
    pub media_dir: String,

    // Artifact discovery
    pub artifact_extension: String,

    // Provisioning
    /// System packages followed by the rendering library
    pub primary_install: String,
    /// Rendering library only, used when the primary install fails
    pub fallback_install: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            scene_file: "scene.py".to_string(),
            render_program: "manim".to_string(),
            quality_flag: "-ql".to_string(),
            media_dir: "media".to_string(),
            artifact_extension: "mp4".to_string(),
            primary_install: "sudo apt-get update && \
                 sudo apt-get install -y libcairo2-dev libpango1.0-dev ffmpeg pkg-config && \
                 pip install manim"
                .to_string(),
            fallback_install: "pip install manim".to_string(),
        }
    }
}

impl RenderSettings {
    /// Shell command that renders the scene file into the media directory
    pub fn render_command(&self) -> String {
        format!(
            "{} {} {} --media_dir {}",
            self.render_program, self.quality_flag, self.scene_file, self.media_dir
        )
    }

    /// Shell command listing candidate artifacts, one path per line
    pub fn locate_command(&self) -> String {
        format!(
            "find {} -type f -name '*.{}'",
            self.media_dir, self.artifact_extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_render_command() {
        let settings = RenderSettings::default();
        assert_eq!(
            settings.render_command(),
            "manim -ql scene.py --media_dir media"
        );
    }

    #[test]
    fn test_locate_command_uses_extension() {
        let settings = RenderSettings {
            artifact_extension: "gif".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.locate_command(), "find media -type f -name '*.gif'");
    }

    #[test]
    fn test_fallback_install_skips_system_packages() {
        let settings = RenderSettings::default();
        assert!(settings.primary_install.contains("apt-get"));
        assert!(!settings.fallback_install.contains("apt-get"));
        assert!(settings.primary_install.ends_with(&settings.fallback_install));
    }
}
