pub mod scan_event;
pub mod schedule_entry;
pub mod student;
pub mod system_setting;
pub mod user_profile;

pub use scan_event::Entity as ScanEvent;
pub use schedule_entry::Entity as ScheduleEntry;
pub use student::Entity as Student;
pub use system_setting::Entity as SystemSetting;
pub use user_profile::Entity as UserProfile;

pub mod prelude;
