//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, notifications, reservations, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Athenaeum API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_genres,
        books::create_genre,
        books::list_authors,
        books::create_author,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Loans
        loans::borrow_book,
        loans::return_loan,
        loans::renew_loan,
        loans::my_loans,
        loans::get_user_loans,
        loans::list_loans,
        // Reservations
        reservations::reserve_book,
        reservations::cancel_reservation,
        reservations::manage_reservation,
        reservations::my_reservations,
        reservations::list_reservations,
        reservations::sweep_expired,
        // Notifications
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::get_preferences,
        notifications::update_preferences,
        notifications::dispatch_due_reminders,
        notifications::dispatch_overdue_alerts,
        // Stats
        stats::dashboard,
        stats::popular_books,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookShort,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::genre::Genre,
            crate::models::genre::CreateGenre,
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserRole,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatus,
            crate::repository::loans::LoanCounts,
            loans::LoanResponse,
            loans::MyLoansResponse,
            loans::AllLoansResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservationStatus,
            crate::services::reservations::ReservationAction,
            reservations::ReservationResponse,
            reservations::ManageReservationRequest,
            reservations::SweepResponse,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::NotificationKind,
            crate::models::notification::NotificationPreferences,
            crate::models::notification::UpdatePreferences,
            notifications::UnreadCountResponse,
            notifications::DispatchResponse,
            // Stats
            crate::services::stats::DashboardStats,
            crate::services::stats::PopularBook,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "reservations", description = "Reservation queue"),
        (name = "notifications", description = "Notifications and preferences"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
