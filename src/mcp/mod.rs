// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! The MCP layer is the assistant's side of the state channel: it reads and clears the human's
//! selection and issues navigation commands to the viewer.

mod server;
mod types;

pub use server::ContextViewerMcp;
pub use types::*;
