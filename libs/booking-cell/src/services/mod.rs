pub mod slots;
pub mod conflict;
pub mod availability;
pub mod booking;

pub use slots::{generate_slots, is_valid_time_slot, SLOT_MINUTES};
pub use conflict::ConflictService;
pub use availability::AvailabilityService;
pub use booking::BookingService;
