// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Shared-state data model.
//!
//! One JSON document carries the viewer's advertised address, the current line selection, and
//! the pending navigation command.

pub mod navigation;
pub mod selection;
pub mod state;
pub mod timestamp;

pub use navigation::{NavigationAction, NavigationCommand, NavigationKind, NavigationTarget};
pub use selection::{LineRange, Selection, SelectionCommit};
pub use state::{DroppedFields, SharedState};
pub use timestamp::Timestamp;
