//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod email;
pub mod notifications;
pub mod reservations;
pub mod stats;
pub mod users;

use crate::{
    config::{AuthConfig, CirculationConfig, EmailConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub reservations: reservations::ReservationsService,
    pub notifications: notifications::NotificationsService,
    pub stats: stats::StatsService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        email_config: EmailConfig,
        circulation_config: CirculationConfig,
    ) -> Self {
        let email = email::EmailService::new(email_config);
        let notifications =
            notifications::NotificationsService::new(repository.clone(), email.clone());
        Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            circulation: circulation::CirculationService::new(
                repository.clone(),
                circulation_config.clone(),
                notifications.clone(),
            ),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                circulation_config,
            ),
            notifications,
            stats: stats::StatsService::new(repository),
            email,
        }
    }
}
