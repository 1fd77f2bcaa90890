// =============================================================================
// Party Match Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP port when `PORT` is not set
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Header carrying the authenticated member id (set by the identity gateway)
pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// Header carrying a client-chosen key for replay-safe swipes
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// =============================================================================
// DATABASE
// =============================================================================

/// Pool size when `DB_MAX_CONNECTIONS` is not set
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// How long a request waits for a pooled connection
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// CANDIDATE PAGINATION
// =============================================================================

/// Businesses requested from the search provider per page
pub const CANDIDATE_PAGE_SIZE: u32 = 20;

/// Hard cap on the absolute result stream of one search
pub const MAX_CANDIDATE_RESULTS: u32 = 1000;

/// Category used when a party has not picked any
pub const DEFAULT_SEARCH_CATEGORY: &str = "restaurants";

/// Largest radius the search provider accepts, in meters
pub const MAX_SEARCH_RADIUS_METERS: u32 = 40_000;

/// Price tiers run from `$` (1) to `$$$$` (4)
pub const MAX_PRICE_TIER: u8 = 4;

// =============================================================================
// SEARCH PROVIDER
// =============================================================================

/// Business search endpoint
pub const DEFAULT_SEARCH_API_URL: &str = "https://api.yelp.com/v3/businesses/search";

/// Timeout for one provider request
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Attempts before a conflicting transaction surfaces as contention
pub const DEFAULT_TX_MAX_ATTEMPTS: u32 = 8;

/// First retry delay; doubles per attempt
pub const TX_BACKOFF_BASE_MS: u64 = 10;

/// Ceiling for a single retry delay
pub const TX_BACKOFF_MAX_MS: u64 = 500;

// =============================================================================
// LEDGER SWEEPER
// =============================================================================

/// How often the sweeper walks every party ledger
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Ledger entries untouched for this long are dropped
pub const DEFAULT_LEDGER_RETENTION_DAYS: i64 = 30;
