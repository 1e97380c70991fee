//! User profile model as consumed by the matching core.
//!
//! Profiles are owned by the external profile subsystem; this crate reads
//! them (and flips `is_active` during the inactivity sweep) but never edits
//! names, vectors, or locations.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of interest slots in every interest vector.
pub const INTEREST_SLOTS: usize = 15;
/// Number of boolean privacy flags per profile.
pub const PRIVACY_FLAGS: usize = 9;

/// Validation errors for user-facing profile fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The identifier is empty or not a UUID.
    #[error("user id must be a valid UUID")]
    InvalidId,
    /// The display name is empty once trimmed.
    #[error("display name must not be empty")]
    EmptyDisplayName,
    /// The display name is shorter than the minimum.
    #[error("display name must be at least {min} characters")]
    DisplayNameTooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The display name exceeds the maximum.
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The display name contains disallowed characters.
    #[error("display name may only contain letters, numbers, spaces, or underscores")]
    DisplayNameInvalidCharacters,
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an already-validated UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validate and construct a [`UserId`] from string input.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Minimum allowed length for a display name.
pub const DISPLAY_NAME_MIN: usize = 3;
/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 32;

static DISPLAY_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn display_name_regex() -> &'static Regex {
    DISPLAY_NAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        Regex::new("^[A-Za-z0-9_ ]+$")
            .unwrap_or_else(|error| panic!("display name regex failed to compile: {error}"))
    })
}

/// Human readable display name for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`] from owned input.
    pub fn new(display_name: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(display_name.into())
    }

    fn from_owned(display_name: String) -> Result<Self, UserValidationError> {
        if display_name.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }

        let length = display_name.chars().count();
        if length < DISPLAY_NAME_MIN {
            return Err(UserValidationError::DisplayNameTooShort {
                min: DISPLAY_NAME_MIN,
            });
        }
        if length > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }

        if !display_name_regex().is_match(&display_name) {
            return Err(UserValidationError::DisplayNameInvalidCharacters);
        }

        Ok(Self(display_name))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Fixed-length vector of interest ratings, one slot per catalogue entry.
///
/// A `None` slot means the user never rated that interest; scoring treats
/// it as the neutral value `1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterestVector(Vec<Option<f64>>);

impl InterestVector {
    /// Build a vector from raw slots, padding or truncating to
    /// [`INTEREST_SLOTS`].
    pub fn new(mut slots: Vec<Option<f64>>) -> Self {
        slots.resize(INTEREST_SLOTS, None);
        Self(slots)
    }

    /// A vector with every slot unrated.
    pub fn neutral() -> Self {
        Self(vec![None; INTEREST_SLOTS])
    }

    /// Raw slots, `None` where unrated.
    pub fn slots(&self) -> &[Option<f64>] {
        &self.0
    }

    /// Slots with unrated entries substituted by the neutral value `1.0`.
    pub fn resolved(&self) -> Vec<f64> {
        self.0.iter().map(|slot| slot.unwrap_or(1.0)).collect()
    }
}

/// Profile fields that privacy flags can hide from non-matched viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PrivacyField {
    /// Free-text biography.
    Bio,
    /// Coarse location and derived distance.
    Location,
    /// Date of birth / age.
    Age,
    /// Phone number.
    Phone,
    /// Messenger and social links.
    SocialLinks,
    /// Profile photo.
    Photo,
    /// Individual interest ratings.
    Interests,
    /// Online/offline activity indicator.
    Activity,
    /// City name.
    City,
}

impl PrivacyField {
    fn index(self) -> usize {
        match self {
            Self::Bio => 0,
            Self::Location => 1,
            Self::Age => 2,
            Self::Phone => 3,
            Self::SocialLinks => 4,
            Self::Photo => 5,
            Self::Interests => 6,
            Self::Activity => 7,
            Self::City => 8,
        }
    }
}

/// Boolean visibility gates applied when rendering a profile to a viewer
/// the user has not matched with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivacyVector(Vec<bool>);

impl PrivacyVector {
    /// Build from raw flags, padding missing entries as visible.
    pub fn new(mut flags: Vec<bool>) -> Self {
        flags.resize(PRIVACY_FLAGS, true);
        Self(flags)
    }

    /// Everything visible; used when a profile carries no flags.
    pub fn permissive() -> Self {
        Self(vec![true; PRIVACY_FLAGS])
    }

    /// Whether the given field may be shown to non-matched viewers.
    pub fn allows(&self, field: PrivacyField) -> bool {
        self.0.get(field.index()).copied().unwrap_or(true)
    }

    /// Raw flag values.
    pub fn flags(&self) -> &[bool] {
        &self.0
    }
}

impl Default for PrivacyVector {
    fn default() -> Self {
        Self::permissive()
    }
}

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Mean earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeoPoint {
    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// User profile snapshot read from the attribute store.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Stable identifier.
    pub id: UserId,
    /// Display name shown to other users.
    pub display_name: DisplayName,
    /// Avatar URL served by the external media store.
    pub avatar_url: Option<String>,
    /// Interest ratings; absent when the user rated nothing yet.
    pub interest_vector: Option<InterestVector>,
    /// Visibility gates for non-matched viewers.
    pub privacy: PrivacyVector,
    /// Last known coordinates, if the user shared a location.
    pub location: Option<GeoPoint>,
    /// Whether the user participates in matching and grouping.
    pub is_active: bool,
    /// Last authenticated activity; drives the inactivity sweep.
    pub last_seen_at: DateTime<Utc>,
}

impl Profile {
    /// Interest vector with unrated users resolved to all-neutral.
    pub fn interests_or_neutral(&self) -> InterestVector {
        self.interest_vector
            .clone()
            .unwrap_or_else(InterestVector::neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ab", false)]
    #[case("Alice_Bob 123", true)]
    #[case("bad$char", false)]
    fn display_name_validation(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(DisplayName::new(raw).is_ok(), ok);
    }

    #[rstest]
    fn display_name_rejects_overlong_input() {
        let raw = "a".repeat(DISPLAY_NAME_MAX + 1);
        assert_eq!(
            DisplayName::new(raw),
            Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX
            })
        );
    }

    #[rstest]
    fn user_id_parse_rejects_garbage() {
        assert_eq!(UserId::parse("not-a-uuid"), Err(UserValidationError::InvalidId));
    }

    #[rstest]
    fn interest_vector_resolves_unrated_slots_to_neutral() {
        let vector = InterestVector::new(vec![Some(5.0), None]);
        let resolved = vector.resolved();
        assert_eq!(resolved.len(), INTEREST_SLOTS);
        assert_eq!(resolved.first(), Some(&5.0));
        assert_eq!(resolved.get(1), Some(&1.0));
        assert_eq!(resolved.last(), Some(&1.0));
    }

    #[rstest]
    fn privacy_vector_defaults_missing_flags_to_visible() {
        let privacy = PrivacyVector::new(vec![false]);
        assert!(!privacy.allows(PrivacyField::Bio));
        assert!(privacy.allows(PrivacyField::Location));
    }

    #[rstest]
    fn haversine_matches_known_distance() {
        // Berlin -> Paris is roughly 878 km.
        let berlin = GeoPoint {
            lat: 52.52,
            lng: 13.405,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = berlin.distance_km(&paris);
        assert!((distance - 878.0).abs() < 5.0, "got {distance}");
    }

    #[rstest]
    fn zero_distance_for_identical_points() {
        let point = GeoPoint { lat: 1.0, lng: 2.0 };
        assert!(point.distance_km(&point).abs() < f64::EPSILON);
    }
}
