//! # Statement Set
//!
//! Every statement the relational store issues, as fixed strings with
//! positional parameters. A driver adapter needs to support exactly this
//! set; the in-memory executor interprets it directly.

/// Table layout: one row per URI.
pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS records (\
    uri TEXT PRIMARY KEY, \
    data TEXT NOT NULL, \
    ts BIGINT NOT NULL, \
    created_at BIGINT NOT NULL, \
    updated_at BIGINT NOT NULL)";

/// Index backing the prefix scans.
pub const CREATE_URI_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS records_uri_idx ON records (uri)";

/// Insert-or-update one record. Params: uri, data json, ts.
pub const UPSERT: &str = "INSERT INTO records (uri, data, ts, created_at, updated_at) \
    VALUES ($1, $2, $3, $3, $3) \
    ON CONFLICT (uri) DO UPDATE SET data = $2, ts = $3, updated_at = $3";

/// Fetch one record. Params: uri. Columns: data, ts.
pub const SELECT_ONE: &str = "SELECT data, ts FROM records WHERE uri = $1";

/// Prefix scan for listing. Params: like pattern (escaped, `%`-suffixed).
/// Columns: uri, ts.
pub const SCAN_PREFIX: &str =
    "SELECT uri, ts FROM records WHERE uri LIKE $1 ESCAPE '\\'";

/// All stored URIs, for program-key discovery. Columns: uri.
pub const SELECT_URIS: &str = "SELECT uri FROM records";

/// Delete one record. Params: uri.
pub const DELETE: &str = "DELETE FROM records WHERE uri = $1";

/// Connectivity probe.
pub const PING: &str = "SELECT 1";
