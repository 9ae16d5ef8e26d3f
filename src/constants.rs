//! Feature keys and engine constants

// Feature keys (tenant scoped)
pub const TASKS_MANAGEMENT: &str = "tasks_management";
pub const BOOKING_SYSTEM: &str = "booking_system";
pub const STAFF_MANAGEMENT: &str = "staff_management";
pub const APPOINTMENTS: &str = "appointments";
pub const MESSAGING: &str = "messaging";
pub const AI_ASSISTANT: &str = "ai_assistant";
pub const BUSINESS_PAGE: &str = "business_page";
pub const JOB_CARDS: &str = "job_cards";
pub const WORK_LOGS: &str = "work_logs";
pub const BILLING: &str = "billing";

// Platform-wide, outside any tenant
pub const PLATFORM_ADMIN: &str = "platform_admin";

/// Every feature the built-in table knows about
pub const ALL_FEATURES: &[&str] = &[
    TASKS_MANAGEMENT,
    BOOKING_SYSTEM,
    STAFF_MANAGEMENT,
    APPOINTMENTS,
    MESSAGING,
    AI_ASSISTANT,
    BUSINESS_PAGE,
    JOB_CARDS,
    WORK_LOGS,
    BILLING,
    PLATFORM_ADMIN,
];

/// Default upper bound on cached decisions before the cache is flushed
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;
