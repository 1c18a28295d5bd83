//! Cross-module scene graph tests

mod hierarchy_properties;
