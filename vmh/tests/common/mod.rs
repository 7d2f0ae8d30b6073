pub mod logging;

pub use assertions::{assert_contains, assert_not_contains, assert_path_exists};
pub use fixtures::VistaFixture;
pub use logging::init_test_logging;
