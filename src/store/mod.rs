//! Backends the board reads schedules from, and that the gateway forwards writes to

use once_cell::sync::Lazy;

pub mod memory;
pub mod sheet;
pub mod supabase;

pub use memory::MemoryStore;
pub use sheet::SheetSource;
pub use supabase::SupabaseStore;

/// A single HTTP client shared by every backend, so that connections are reused between requests
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);
