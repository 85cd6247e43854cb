use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The kind of enhancement requested for an image.
///
/// The string form (`upscale`, `face_restore`, `illustration`, `poster`) is what users
/// type in `/mode` and what the HTTP API takes as its path segment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Super-resolution upscaling
    Upscale,
    /// Face detail restoration
    FaceRestore,
    /// Stylized, illustration-like rendering
    Illustration,
    /// Poster-style edge rendering
    Poster,
}

impl Mode {
    /// Parses a user-supplied mode name. Case and surrounding whitespace are ignored.
    pub fn parse(name: &str) -> Option<Self> {
        name.trim().to_lowercase().parse().ok()
    }

    /// All mode names, in declaration order.
    pub fn names() -> Vec<&'static str> {
        Mode::iter().map(|m| -> &'static str { m.into() }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_known_modes() {
        assert_eq!(Mode::parse("upscale"), Some(Mode::Upscale));
        assert_eq!(Mode::parse("face_restore"), Some(Mode::FaceRestore));
        assert_eq!(Mode::parse(" Illustration "), Some(Mode::Illustration));
        assert_eq!(Mode::parse("POSTER"), Some(Mode::Poster));
    }

    #[test]
    fn test_parse_rejects_unknown_modes() {
        assert_eq!(Mode::parse("bogus"), None);
        assert_eq!(Mode::parse(""), None);
        assert_eq!(Mode::parse("face-restore"), None);
    }

    #[test]
    fn test_display_matches_wire_name() {
        for mode in Mode::iter() {
            let wire: &'static str = mode.into();
            assert_eq!(mode.to_string(), wire);
            assert_eq!(mode.as_ref(), wire);
            assert_eq!(Mode::parse(wire), Some(mode));
        }
    }

    #[test]
    fn test_names_lists_all_four() {
        assert_eq!(Mode::names(), vec!["upscale", "face_restore", "illustration", "poster"]);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Mode::FaceRestore).unwrap();
        assert_eq!(json, "\"face_restore\"");
        let back: Mode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Mode::FaceRestore);
    }
}
