pub mod broadphase {
    pub use azrael_broadphase::*;
}

pub mod broker {
    pub use azrael_broker::*;
}

pub mod events {
    pub use azrael_events::*;
}

pub mod grid {
    pub use azrael_grid::*;
}

pub mod leonard {
    pub use azrael_leonard::*;
}

pub mod log {
    pub use azrael_log::*;
}

pub mod math {
    pub use azrael_math::*;
}

pub mod physics {
    pub use azrael_physics::*;
}

pub mod store {
    pub use azrael_store::*;
}

pub mod types {
    pub use azrael_types::*;
}

pub mod worker {
    pub use azrael_worker::*;
}
