//! Movement and obstacle catalogs.
//!
//! Static lookup tables mapping the backend's numeric codes to display
//! labels. Demo-run progress reports reuse the movement table, since the
//! code they carry is the currently-executing step's movement code.

use crate::Channel;

/// Movement codes understood by the carbot firmware.
pub const MOVES: &[(i64, &str)] = &[
    (1, "Forward"),
    (2, "Reverse"),
    (3, "Stop"),
    (4, "Forward right turn"),
    (5, "Forward left turn"),
    (6, "Reverse right turn"),
    (7, "Reverse left turn"),
    (8, "Turn 90\u{b0} right"),
    (9, "Turn 90\u{b0} left"),
    (10, "Spin 360\u{b0} right"),
    (11, "Spin 360\u{b0} left"),
];

/// Obstacle positions the distance sensors report.
pub const OBSTACLES: &[(i64, &str)] = &[
    (1, "Ahead"),
    (2, "Ahead left"),
    (3, "Ahead right"),
    (4, "Ahead both sides"),
    (5, "Backing off"),
];

/// Code-to-label lookup, per channel.
pub trait Catalog: Send + Sync {
    fn label(&self, channel: Channel, code: i64) -> Option<&str>;

    fn contains(&self, channel: Channel, code: i64) -> bool {
        self.label(channel, code).is_some()
    }
}

/// The built-in firmware catalogs.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticCatalog;

impl Catalog for StaticCatalog {
    fn label(&self, channel: Channel, code: i64) -> Option<&str> {
        let table = match channel {
            Channel::Movement | Channel::DemoRun => MOVES,
            Channel::Obstacle => OBSTACLES,
        };
        table.iter().find(|(id, _)| *id == code).map(|(_, name)| *name)
    }
}

/// Display label for a possibly-unknown code: catalog name, `#<code>` for a
/// code outside the catalog, `#?` when the record carried no code at all.
pub fn display_label(catalog: &dyn Catalog, channel: Channel, code: Option<i64>) -> String {
    match code {
        Some(code) => catalog
            .label(channel, code)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("#{}", code)),
        None => String::from("#?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let catalog = StaticCatalog;
        assert_eq!(catalog.label(Channel::Movement, 1), Some("Forward"));
        assert_eq!(catalog.label(Channel::Obstacle, 5), Some("Backing off"));
        assert!(catalog.contains(Channel::Movement, 11));
        assert!(!catalog.contains(Channel::Movement, 12));
    }

    #[test]
    fn test_demo_run_uses_movement_table() {
        let catalog = StaticCatalog;
        assert_eq!(catalog.label(Channel::DemoRun, 3), Some("Stop"));
    }

    #[test]
    fn test_display_label_fallbacks() {
        let catalog = StaticCatalog;
        assert_eq!(display_label(&catalog, Channel::Movement, Some(2)), "Reverse");
        assert_eq!(display_label(&catalog, Channel::Movement, Some(99)), "#99");
        assert_eq!(display_label(&catalog, Channel::Movement, None), "#?");
    }
}
