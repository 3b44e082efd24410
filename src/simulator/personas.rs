//! Persona definitions
//!
//! Personas load from a JSON file; a missing or malformed file falls back
//! to the built-in set. That fallback is a data-availability concern, not
//! a pipeline failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// A narrative profile the simulator speaks through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Short human-readable name, e.g. "Blind user with screen reader"
    pub label: String,
    pub description: String,
    /// System instruction establishing the persona's perspective
    pub prompt: String,
}

/// Ordered collection of personas keyed by id
#[derive(Debug, Clone)]
pub struct PersonaLibrary {
    personas: BTreeMap<String, Persona>,
}

impl PersonaLibrary {
    /// Load personas from a JSON file, falling back to the built-in set
    /// when the file is missing, empty, or malformed.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(library) => library,
            Err(reason) => {
                warn!(
                    "Error loading personas from {}: {}. Using built-in personas.",
                    path.display(),
                    reason
                );
                Self::builtin()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        if content.trim().is_empty() {
            return Err("personas file is empty".to_string());
        }
        let personas: BTreeMap<String, Persona> =
            serde_json::from_str(&content).map_err(|e| e.to_string())?;
        if personas.is_empty() {
            return Err("personas file defines no personas".to_string());
        }
        Ok(Self { personas })
    }

    /// The fixed built-in persona set
    pub fn builtin() -> Self {
        let mut personas = BTreeMap::new();

        personas.insert(
            "blind_screen_reader".to_string(),
            Persona {
                label: "Blind user with screen reader".to_string(),
                description: "Navigates entirely using keyboard and screen reader software."
                    .to_string(),
                prompt: "You are simulating a user who is blind and relies fully on screen \
                         reader software to navigate the web. This user cannot see visual \
                         layout, images, or content. They use keyboard shortcuts and linear \
                         audio output to understand the structure of the page.\n\n\
                         Pay special attention to:\n\
                         - Page title, landmarks, heading structure\n\
                         - Missing or non-descriptive alt text on images\n\
                         - Buttons or links without labels\n\
                         - Dynamic content that may not be announced\n\
                         - Reading order and tab sequence\n\n\
                         Highlight the biggest frustrations and recommend improvements to \
                         make this experience smoother for screen reader users."
                    .to_string(),
            },
        );

        personas.insert(
            "low_vision_elderly".to_string(),
            Persona {
                label: "Low-vision elderly person".to_string(),
                description: "Struggles with contrast, font size, and visual layout.".to_string(),
                prompt: "You are simulating an elderly user with low vision and declining \
                         visual acuity. This person struggles with small font sizes, low \
                         color contrast, dense content, and poor spacing. They may zoom in \
                         to read, use a magnifier, or have trouble tracking elements.\n\n\
                         Evaluate:\n\
                         - Text readability (size, contrast, spacing)\n\
                         - Link and button visibility\n\
                         - Zoom behavior (does layout break?)\n\
                         - Visual clarity and clutter\n\n\
                         Provide feedback on how readable and usable the page is for someone \
                         with reduced visual perception."
                    .to_string(),
            },
        );

        personas.insert(
            "motor_impaired_keyboard".to_string(),
            Persona {
                label: "Motor-impaired keyboard-only user".to_string(),
                description: "Cannot use a mouse, relies on keyboard for navigation.".to_string(),
                prompt: "You are simulating a user with a motor impairment who cannot use a \
                         mouse and relies entirely on keyboard navigation. They may use \
                         assistive devices like sip-and-puff or single-switch input.\n\n\
                         Assess the experience based on:\n\
                         - Tab order consistency\n\
                         - Presence of visible focus indicators\n\
                         - Availability of skip links\n\
                         - Whether all interactive elements (forms, menus, modals) are \
                         accessible by keyboard\n\
                         - Any keyboard traps or broken tab loops\n\n\
                         Report on how frustrating or seamless the experience would be for a \
                         keyboard-only user."
                    .to_string(),
            },
        );

        Self { personas }
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Persona)> {
        self.personas.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_has_three_personas() {
        let library = PersonaLibrary::builtin();
        assert_eq!(library.len(), 3);
        assert!(library.get("blind_screen_reader").is_some());
        assert!(library.get("low_vision_elderly").is_some());
        assert!(library.get("motor_impaired_keyboard").is_some());
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let library = PersonaLibrary::load(Path::new("/nonexistent/personas.json"));
        assert_eq!(library.len(), 3);
    }

    #[test]
    fn malformed_file_falls_back_to_builtin() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        std::fs::write(&path, "{ not json").unwrap();
        let library = PersonaLibrary::load(&path);
        assert_eq!(library.len(), 3);
    }

    #[test]
    fn empty_file_falls_back_to_builtin() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        std::fs::write(&path, "   ").unwrap();
        let library = PersonaLibrary::load(&path);
        assert_eq!(library.len(), 3);
    }

    #[test]
    fn valid_file_overrides_builtin() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        std::fs::write(
            &path,
            r#"{
                "deaf_user": {
                    "label": "Deaf user",
                    "description": "Relies on captions and transcripts.",
                    "prompt": "You are simulating a deaf user."
                }
            }"#,
        )
        .unwrap();

        let library = PersonaLibrary::load(&path);
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("deaf_user").unwrap().label, "Deaf user");
        assert!(library.get("blind_screen_reader").is_none());
    }

    #[test]
    fn ids_are_ordered() {
        let library = PersonaLibrary::builtin();
        let ids: Vec<&str> = library.ids().collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}
