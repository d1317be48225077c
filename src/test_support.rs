use tokio::sync::Mutex as AsyncMutex;

/// Serialises tests that read or write `RLMSCOPE_*` environment variables.
/// Sync tests take it with `.blocking_lock()`, async tests with `.lock().await`.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
