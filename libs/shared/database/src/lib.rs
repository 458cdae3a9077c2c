pub mod supabase;

pub use supabase::{eq, SupabaseClient};
