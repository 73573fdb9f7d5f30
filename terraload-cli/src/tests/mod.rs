//! Shared test harness modules for the Terraload CLI.

use super::*;
