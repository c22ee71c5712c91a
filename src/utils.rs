//! Small helpers shared across modules.

use std::path::Path;

/// Display a path with the home directory replaced by `~`.
///
/// Keeps user names out of logs and terminal output.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Render a fixed-width progress bar for a fraction in `0.0..=1.0`.
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_path_outside_home_is_unchanged() {
        assert_eq!(private_path(Path::new("/etc/salatr.toml")), "/etc/salatr.toml");
    }

    #[test]
    fn test_private_path_hides_home() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".config").join("salatr").join("salatr.toml");
            assert_eq!(private_path(&path), "~/.config/salatr/salatr.toml");
        }
    }

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(0.5, 4), "██░░");
        assert_eq!(progress_bar(2.0, 4), "████");
        assert_eq!(progress_bar(f64::NAN, 2), "░░");
    }
}
