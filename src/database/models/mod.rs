pub mod category;
pub mod change_order;
pub mod employee;
pub mod equipment_log;
pub mod gmail_connection;
pub mod material;
pub mod overhead_entry;
pub mod progress_report;
pub mod project;
pub mod receipt;
pub mod receipt_link;
pub mod subcontractor_entry;
pub mod timesheet;

pub use category::{Category, NewCategory};
pub use change_order::{ChangeOrder, NewChangeOrder};
pub use employee::{Employee, NewEmployee};
pub use equipment_log::{EquipmentLog, NewEquipmentLog};
pub use gmail_connection::{GmailConnection, NewGmailConnection, SyncStatus};
pub use material::Material;
pub use overhead_entry::{NewOverheadEntry, OverheadEntry};
pub use progress_report::{NewMaterial, NewProgressReport, ProgressReport};
pub use project::{NewProject, Project, UpdateProject};
pub use receipt::{Receipt, ReceiptStatus};
pub use receipt_link::{EntryKind, ReceiptLink};
pub use subcontractor_entry::{NewSubcontractorEntry, SubcontractorEntry};
pub use timesheet::{NewTimesheet, Timesheet};
