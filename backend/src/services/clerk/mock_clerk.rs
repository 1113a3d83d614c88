use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{errors::ClerkError, models::ClerkUserData, service::ClerkService};

#[derive(Clone, Default)]
pub struct MockClerkService {
    pub users: Arc<Mutex<HashMap<String, ClerkUserData>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl MockClerkService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: ClerkUserData) -> Self {
        self.users.lock().unwrap().insert(user.id.clone(), user);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ClerkService for MockClerkService {
    async fn get_user(&self, clerk_id: &str) -> Result<ClerkUserData, ClerkError> {
        self.calls.lock().unwrap().push(clerk_id.to_string());
        if self.fail {
            return Err(ClerkError::Api {
                status: 500,
                message: "mock clerk failure".into(),
            });
        }
        self.users
            .lock()
            .unwrap()
            .get(clerk_id)
            .cloned()
            .ok_or(ClerkError::UserNotFound)
    }
}
