use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::subscription_repository::SubscriptionRepository;
use super::user_repository::UserRepository;
use crate::models::subscription::{
    GatewayStatusUpdate, GatewayUpdateOutcome, Subscription, SubscriptionUpsert,
};
use crate::models::user::{IdentityProfile, IdentityUpsertOutcome, User, UserRole};

/// In-memory stand-in for Postgres. Mirrors the upsert and staleness rules of
/// the SQL implementations and counts every write.
#[derive(Default)]
pub struct MockDb {
    pub users: Mutex<HashMap<String, User>>,
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
    pub user_writes: Mutex<usize>,
    pub subscription_writes: Mutex<usize>,
    pub should_fail: bool,
    pub fail_subscription_writes: bool,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds a user row as if created by an earlier identity event.
    pub fn with_user(self, clerk_id: &str, email: &str) -> Self {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            clerk_id: clerk_id.to_string(),
            email: email.to_string(),
            first_name: Some("Test".into()),
            last_name: Some("User".into()),
            image_url: None,
            phone: None,
            role: UserRole::Freelancer,
            identity_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(clerk_id.to_string(), user);
        self
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.user_id, subscription);
        self
    }

    pub fn user(&self, clerk_id: &str) -> Option<User> {
        self.users.lock().unwrap().get(clerk_id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn subscription_for(&self, user_id: Uuid) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(&user_id).cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn total_writes(&self) -> usize {
        *self.user_writes.lock().unwrap() + *self.subscription_writes.lock().unwrap()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self.user(clerk_id))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn upsert_identity_user(
        &self,
        profile: &IdentityProfile,
    ) -> Result<IdentityUpsertOutcome, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let now = Utc::now();

        if let Some(existing) = users.get_mut(&profile.clerk_id) {
            if existing
                .identity_synced_at
                .is_some_and(|synced| synced > profile.observed_at)
            {
                return Ok(IdentityUpsertOutcome::Stale(existing.clone()));
            }
            existing.email = profile.email.clone();
            existing.first_name = profile.first_name.clone();
            existing.last_name = profile.last_name.clone();
            existing.image_url = profile.image_url.clone();
            existing.phone = profile.phone.clone();
            existing.identity_synced_at = Some(profile.observed_at);
            existing.updated_at = now;
            *self.user_writes.lock().unwrap() += 1;
            return Ok(IdentityUpsertOutcome::Updated(existing.clone()));
        }

        let user = User {
            id: Uuid::new_v4(),
            clerk_id: profile.clerk_id.clone(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            image_url: profile.image_url.clone(),
            phone: profile.phone.clone(),
            role: UserRole::default(),
            identity_synced_at: Some(profile.observed_at),
            created_at: now,
            updated_at: now,
        };
        users.insert(profile.clerk_id.clone(), user.clone());
        *self.user_writes.lock().unwrap() += 1;
        Ok(IdentityUpsertOutcome::Created(user))
    }
}

#[async_trait]
impl SubscriptionRepository for MockDb {
    async fn find_subscription_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        self.check()?;
        Ok(self.subscription_for(user_id))
    }

    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, sqlx::Error> {
        self.check()?;
        if self.fail_subscription_writes {
            return Err(sqlx::Error::Protocol("Mock DB write failure".into()));
        }

        let now = Utc::now();
        let mut subs = self.subscriptions.lock().unwrap();
        let entry = subs.entry(upsert.user_id).or_insert_with(|| Subscription {
            id: Uuid::new_v4(),
            user_id: upsert.user_id,
            razorpay_customer_id: None,
            razorpay_subscription_id: None,
            status: upsert.status,
            plan_id: String::new(),
            plan_name: String::new(),
            amount: 0.0,
            currency: String::new(),
            current_period_end: None,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        });
        // A new gateway subscription starts without the old period or event clock.
        if entry.razorpay_subscription_id.as_deref() != Some(upsert.razorpay_subscription_id.as_str()) {
            entry.current_period_end = None;
            entry.last_event_at = None;
        }
        entry.razorpay_customer_id = Some(upsert.razorpay_customer_id.clone());
        entry.razorpay_subscription_id = Some(upsert.razorpay_subscription_id.clone());
        entry.status = upsert.status;
        entry.plan_id = upsert.plan_id.clone();
        entry.plan_name = upsert.plan_name.clone();
        entry.amount = upsert.amount;
        entry.currency = upsert.currency.clone();
        entry.updated_at = now;

        *self.subscription_writes.lock().unwrap() += 1;
        Ok(entry.clone())
    }

    async fn apply_gateway_update(
        &self,
        update: &GatewayStatusUpdate,
    ) -> Result<GatewayUpdateOutcome, sqlx::Error> {
        self.check()?;
        if self.fail_subscription_writes {
            return Err(sqlx::Error::Protocol("Mock DB write failure".into()));
        }

        let mut subs = self.subscriptions.lock().unwrap();
        let Some(sub) = subs.values_mut().find(|s| {
            s.razorpay_subscription_id.as_deref() == Some(update.razorpay_subscription_id.as_str())
        }) else {
            return Ok(GatewayUpdateOutcome::NotFound);
        };

        if sub.last_event_at.is_some_and(|seen| seen > update.event_at) {
            return Ok(GatewayUpdateOutcome::Stale(sub.clone()));
        }

        sub.status = update.status;
        if update.current_period_end.is_some() {
            sub.current_period_end = update.current_period_end;
        }
        sub.last_event_at = Some(update.event_at);
        sub.updated_at = Utc::now();
        *self.subscription_writes.lock().unwrap() += 1;
        Ok(GatewayUpdateOutcome::Applied(sub.clone()))
    }
}
