pub use super::scan_event::Entity as ScanEvents;
pub use super::schedule_entry::Entity as ScheduleEntries;
pub use super::student::Entity as Students;
pub use super::system_setting::Entity as SystemSettings;
pub use super::user_profile::Entity as UserProfiles;
