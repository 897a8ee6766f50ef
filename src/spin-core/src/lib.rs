// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod activity;
pub mod device;
pub mod engine;
pub mod error;
pub mod recipe;
pub mod step;
pub mod users;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use activity::{ActivitySink, MemoryActivity, NoActivity};
pub use device::command::SpeedCommand;
pub use device::{DriverInfo, MotorDriver, MotorLink};
pub use engine::{Engine, EngineTiming, RunEvent, RunHandle, RunMode, RunOutcome, RunPlan};
pub use error::{SpinError, SpinResult};
pub use recipe::store::{RecipeCatalog, RecipeEntry, RecipeStore};
pub use recipe::{Recipe, RecipeDraft, RecipeId};
pub use step::{ExecutionQueue, SpinStep, Step, WaitStep};
pub use users::UserRegistry;
