use rover_core::LogSummary;
use serde::{Deserialize, Serialize};

/// Logical camera identity, independent of the device node it lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraRole {
    /// Driving camera
    Front,
    /// Camera mounted on the turret, carries the aim mark
    Turret,
}

impl CameraRole {
    pub const ALL: [CameraRole; 2] = [CameraRole::Front, CameraRole::Turret];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Turret => "turret",
        }
    }
}

impl std::fmt::Display for CameraRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound image envelope: one base64 JPEG per role, empty when absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMessage {
    pub image_front: String,
    pub image_turret: String,
}

impl FrameMessage {
    /// The message telling the panel to blank both views
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn is_cleared(&self) -> bool {
        self.image_front.is_empty() && self.image_turret.is_empty()
    }

    /// Set the encoded image for a role
    pub fn set(&mut self, role: CameraRole, encoded: String) {
        match role {
            CameraRole::Front => self.image_front = encoded,
            CameraRole::Turret => self.image_turret = encoded,
        }
    }

    pub fn get(&self, role: CameraRole) -> &str {
        match role {
            CameraRole::Front => &self.image_front,
            CameraRole::Turret => &self.image_turret,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl LogSummary for FrameMessage {
    fn log_summary(&self) -> String {
        format!(
            "FrameMessage(front={}B, turret={}B)",
            self.image_front.len(),
            self.image_turret.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_wire_format() {
        let json = FrameMessage::cleared().to_json().unwrap();
        assert_eq!(json, r#"{"image_front":"","image_turret":""}"#);
    }

    #[test]
    fn test_set_by_role() {
        let mut msg = FrameMessage::default();
        msg.set(CameraRole::Turret, "abc".to_string());
        assert_eq!(msg.get(CameraRole::Turret), "abc");
        assert_eq!(msg.get(CameraRole::Front), "");
        assert!(!msg.is_cleared());
    }
}
