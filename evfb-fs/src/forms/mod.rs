//! Form schema editing and seeding

mod editor;
mod seed;

pub use editor::{
    first_gap, EditError, EditResult, FieldSpec, FieldUpdate, FormEditor, FormSchema, FormUpdate,
};
pub use seed::seed_demo_form;
