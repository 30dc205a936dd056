/// Surfaces failures the user has to see.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
