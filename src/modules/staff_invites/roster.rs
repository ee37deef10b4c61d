use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Static staff data maintained by hand in the roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub discord_id: u64,
    pub username: String,
    #[serde(default)]
    pub vantage_referral_link: Option<String>,
    #[serde(default)]
    pub vantage_ib_code: Option<String>,
    #[serde(default)]
    pub invite_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RosterFile {
    #[serde(default)]
    staff_members: BTreeMap<String, StaffMember>,
}

/// The staff roster file:
///
/// ```json
/// {"staff_members": {"aidan": {"discord_id": 1, "username": "aidan", ...}}}
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaffRoster {
    members: Vec<StaffMember>,
}

impl StaffRoster {
    /// Reads the roster file. A missing or malformed file yields an empty roster.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read staff roster {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json(&raw) {
            Ok(roster) => {
                info!(
                    "Loaded {} staff members from {}",
                    roster.members.len(),
                    path.display()
                );
                roster
            }
            Err(e) => {
                warn!("Malformed staff roster {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: RosterFile = serde_json::from_str(raw)?;
        Ok(Self {
            members: file.staff_members.into_values().collect(),
        })
    }

    pub fn members(&self) -> &[StaffMember] {
        &self.members
    }

    pub fn by_discord_id(&self, discord_id: u64) -> Option<&StaffMember> {
        self.members.iter().find(|m| m.discord_id == discord_id)
    }

    pub fn by_invite_code(&self, code: &str) -> Option<&StaffMember> {
        self.members
            .iter()
            .find(|m| m.invite_code.as_deref() == Some(code))
    }

    pub fn contains(&self, discord_id: u64) -> bool {
        self.by_discord_id(discord_id).is_some()
    }
}

#[cfg(test)]
pub(crate) fn sample() -> StaffRoster {
    StaffRoster::from_json(
        r#"{
            "staff_members": {
                "aidan": {
                    "discord_id": 100,
                    "username": "aidan",
                    "vantage_referral_link": "https://example.com/ref/aidan",
                    "vantage_ib_code": "IB-100",
                    "invite_code": "ABC123"
                },
                "tom": {
                    "discord_id": 200,
                    "username": "tom",
                    "vantage_referral_link": "https://example.com/ref/tom",
                    "vantage_ib_code": "IB-200"
                }
            }
        }"#,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookups() {
        let roster = sample();
        assert_eq!(roster.members().len(), 2);
        assert_eq!(roster.by_discord_id(200).unwrap().username, "tom");
        assert_eq!(roster.by_invite_code("ABC123").unwrap().discord_id, 100);
        assert!(roster.by_invite_code("XYZ789").is_none());
        assert!(!roster.contains(300));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"staff_members": {{"x": {{"discord_id": 7, "username": "x"}}}}}}"#
        )
        .unwrap();

        let roster = StaffRoster::load(file.path());
        let member = roster.by_discord_id(7).unwrap();
        assert_eq!(member.vantage_referral_link, None);
        assert_eq!(member.invite_code, None);
    }

    #[test]
    fn test_missing_or_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StaffRoster::load(&dir.path().join("absent.json"))
            .members()
            .is_empty());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert!(StaffRoster::load(&bad).members().is_empty());
    }
}
