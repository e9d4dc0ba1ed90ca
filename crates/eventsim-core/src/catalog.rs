//! Reference Catalogs
//!
//! Fixed pools of users and content items generated once at startup.
//! The synthesizer draws from them by index; the pull API pages through them.
//! Nothing mutates a catalog after construction, so it is shared as plain
//! `Arc<Catalogs>` without locking.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_COUNT: usize = 10_000;
pub const DEFAULT_CONTENT_COUNT: usize = 1_000;

const USER_CREATED_YEAR: i32 = 2023;
const CONTENT_CREATED_YEAR: i32 = 2024;
const MIN_AGE: u8 = 18;
const MAX_AGE: u8 = 82;

// ============================================================================
// Attribute vocabularies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Free,
    Paid,
    Trial,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Free, UserStatus::Paid, UserStatus::Trial];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Country {
    US,
    BR,
    IT,
    FR,
}

impl Country {
    pub const ALL: [Country; 4] = [Country::US, Country::BR, Country::IT, Country::FR];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Text,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Video, MediaType::Audio, MediaType::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerType {
    Academic,
    Podcast,
    Reflection,
    LectioDivina,
    Rosary,
    Meditation,
}

impl PrayerType {
    pub const ALL: [PrayerType; 6] = [
        PrayerType::Academic,
        PrayerType::Podcast,
        PrayerType::Reflection,
        PrayerType::LectioDivina,
        PrayerType::Rosary,
        PrayerType::Meditation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Podcast => "podcast",
            Self::Reflection => "reflection",
            Self::LectioDivina => "lectio_divina",
            Self::Rosary => "rosary",
            Self::Meditation => "meditation",
        }
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: String,
    pub age: u8,
    pub status: UserStatus,
    pub country: Country,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Content {
    pub content_id: String,
    pub media_type: MediaType,
    pub prayer_type: PrayerType,
    pub created_at: DateTime<Utc>,
}

/// How much of a catalog entry synthesized events carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Full user records and denormalized content attributes
    #[default]
    Rich,
    /// Identifier strings only
    Bare,
}

/// Catalog sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Number of users (default: 10,000)
    pub users: usize,
    /// Number of content items (default: 1,000)
    pub content: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            users: DEFAULT_USER_COUNT,
            content: DEFAULT_CONTENT_COUNT,
        }
    }
}

// ============================================================================
// Catalogs
// ============================================================================

/// Read-only user and content pools
#[derive(Debug, Clone)]
pub struct Catalogs {
    users: Vec<User>,
    content: Vec<Content>,
}

impl Catalogs {
    /// Build both catalogs. Each holds at least one entry.
    pub fn generate<R: Rng + ?Sized>(config: &CatalogConfig, rng: &mut R) -> Self {
        let users = (1..=config.users.max(1))
            .map(|i| User {
                user_id: format!("user_{}", i),
                age: rng.random_range(MIN_AGE..=MAX_AGE),
                status: *UserStatus::ALL.choose(rng).unwrap_or(&UserStatus::Free),
                country: *Country::ALL.choose(rng).unwrap_or(&Country::US),
                created_at: random_midnight_in_year(USER_CREATED_YEAR, rng),
            })
            .collect();

        let content = (1..=config.content.max(1))
            .map(|i| Content {
                content_id: format!("content_{}", i),
                media_type: *MediaType::ALL.choose(rng).unwrap_or(&MediaType::Text),
                prayer_type: *PrayerType::ALL
                    .choose(rng)
                    .unwrap_or(&PrayerType::Reflection),
                created_at: random_midnight_in_year(CONTENT_CREATED_YEAR, rng),
            })
            .collect();

        Self { users, content }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn content(&self) -> &[Content] {
        &self.content
    }

    pub fn random_user<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&User> {
        self.users.choose(rng)
    }

    pub fn random_content<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Content> {
        self.content.choose(rng)
    }

    /// Slice the user catalog for offset pagination.
    ///
    /// Returns `None` when `offset` is negative or past the last user.
    /// `limit` is clamped to `[0, max_limit]`.
    pub fn user_page(&self, offset: i64, limit: i64, max_limit: usize) -> Option<UserPage<'_>> {
        let total = self.users.len();
        let offset = usize::try_from(offset).ok().filter(|o| *o < total)?;
        let limit = usize::try_from(limit).unwrap_or(0).min(max_limit);

        let end = offset.saturating_add(limit).min(total);
        let has_more = end < total;

        Some(UserPage {
            users: &self.users[offset..end],
            total,
            offset,
            limit,
            has_more,
            next_offset: if has_more { end as i64 } else { -1 },
        })
    }
}

/// One page of the user catalog
#[derive(Debug, Clone, Serialize)]
pub struct UserPage<'a> {
    pub users: &'a [User],
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    /// `-1` on the last page
    pub next_offset: i64,
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn random_midnight_in_year<R: Rng + ?Sized>(year: i32, rng: &mut R) -> DateTime<Utc> {
    let days: u32 = if is_leap_year(year) { 366 } else { 365 };
    let ordinal = rng.random_range(1..=days);
    NaiveDate::from_yo_opt(year, ordinal)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use rand::rngs::StdRng;

    fn catalogs() -> Catalogs {
        let mut rng = StdRng::seed_from_u64(7);
        Catalogs::generate(&CatalogConfig::default(), &mut rng)
    }

    #[test]
    fn test_default_sizes_and_ids() {
        let catalogs = catalogs();

        assert_eq!(catalogs.users().len(), 10_000);
        assert_eq!(catalogs.content().len(), 1_000);
        assert_eq!(catalogs.users()[0].user_id, "user_1");
        assert_eq!(catalogs.users()[9_999].user_id, "user_10000");
        assert_eq!(catalogs.content()[999].content_id, "content_1000");
    }

    #[test]
    fn test_user_attributes_in_range() {
        let catalogs = catalogs();

        for user in catalogs.users() {
            assert!((18..=82).contains(&user.age), "age {}", user.age);
            assert_eq!(user.created_at.year(), 2023);
            assert_eq!(user.created_at.hour(), 0);
        }
        for item in catalogs.content() {
            assert_eq!(item.created_at.year(), 2024);
        }
    }

    #[test]
    fn test_same_seed_same_catalog() {
        let a = Catalogs::generate(&CatalogConfig::default(), &mut StdRng::seed_from_u64(99));
        let b = Catalogs::generate(&CatalogConfig::default(), &mut StdRng::seed_from_u64(99));
        assert_eq!(a.users(), b.users());
        assert_eq!(a.content(), b.content());
    }

    #[test]
    fn test_user_record_wire_shape() {
        let catalogs = catalogs();
        let json = serde_json::to_value(&catalogs.users()[0]).unwrap();

        assert_eq!(json["user_id"], "user_1");
        assert!(["free", "paid", "trial"].contains(&json["status"].as_str().unwrap()));
        assert!(["US", "BR", "IT", "FR"].contains(&json["country"].as_str().unwrap()));
        assert!(json["created_at"].as_str().unwrap().ends_with("T00:00:00Z"));
    }

    #[test]
    fn test_first_page() {
        let catalogs = catalogs();
        let page = catalogs.user_page(0, 200, 200).unwrap();

        assert_eq!(page.users.len(), 200);
        assert!(page.has_more);
        assert_eq!(page.next_offset, 200);
    }

    #[test]
    fn test_last_page_is_bounded_by_catalog() {
        let catalogs = catalogs();
        let page = catalogs.user_page(9_900, 200, 200).unwrap();

        assert_eq!(page.users.len(), 100);
        assert!(!page.has_more);
        assert_eq!(page.next_offset, -1);
        assert_eq!(page.users[0].user_id, "user_9901");
    }

    #[test]
    fn test_invalid_offsets() {
        let catalogs = catalogs();
        assert!(catalogs.user_page(-1, 200, 200).is_none());
        assert!(catalogs.user_page(10_000, 200, 200).is_none());
    }

    #[test]
    fn test_limit_is_clamped() {
        let catalogs = catalogs();

        let page = catalogs.user_page(0, 5_000, 200).unwrap();
        assert_eq!(page.limit, 200);
        assert_eq!(page.users.len(), 200);

        let page = catalogs.user_page(10, -3, 200).unwrap();
        assert_eq!(page.limit, 0);
        assert!(page.users.is_empty());
        assert_eq!(page.next_offset, 10);
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2000));
    }
}
