// Adapters layer: concrete implementations of the domain ports over HTTP.

pub mod rajaongkir;
pub mod supabase;

pub use rajaongkir::RajaOngkirClient;
pub use supabase::SupabaseDirectory;
