//! Vector canvas editor for the notes/projects workspace.
//!
//! This crate is compiled to WebAssembly and runs in the browser inside a page
//! of the host application. It owns the canvas lifecycle for the open page:
//! translating raw input events into scene mutations, maintaining camera state
//! for pan/zoom, hit-testing objects, routing connectors, keeping undo/redo
//! history and rendering the scene. The host is responsible only for wiring DOM
//! events to the engine and persisting the [`engine::Action::SaveRequested`]
//! snapshots into the page's `canvasData`.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Scene object types and the ordered object store |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Tools, input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against scene objects and resize handles |
//! | [`geometry`] | Bounds and distance helpers shared by hit-testing and rendering |
//! | [`router`] | Connector anchor routing between two objects |
//! | [`history`] | Snapshot-based undo/redo stack |
//! | [`image`] | Upload guard, data URI probing and the decoded-image side table |
//! | [`persist`] | Page `canvasData` encoding and tolerant decoding |
//! | [`config`] | Editor configuration with validated defaults |
//! | [`render`] | Scene rendering to a 2D canvas context |
//! | [`consts`] | Shared numeric constants (zoom limits, minimum sizes, etc.) |

pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod image;
pub mod input;
pub mod persist;
pub mod render;
pub mod router;
