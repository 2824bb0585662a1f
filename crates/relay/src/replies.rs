//! User-facing reply texts.

use crate::routes::ChannelRoutes;

pub const NOT_AUTHORIZED: &str = "Sorry, you are not authorized to use this bot.";
pub const UNSUPPORTED: &str = "Unsupported file type.";
pub const NEW_DIRECTORY_LABEL: &str = "📁 Create new directory";
pub const ASK_DIRECTORY_NAME: &str =
    "Please send the name of the new directory you want to create (without slashes):";
pub const INVALID_DIRECTORY_NAME: &str = "Invalid directory name. It must not be empty or \
                                          contain slashes (/ or \\).\nPlease try again.";
pub const INVALID_OPTION: &str = "Invalid option. Please send your file again.";
pub const STALE_SELECTION: &str =
    "There was an error processing your file. Please send it again.";
pub const STAGING_FAILED: &str = "❌ Could not download your file. Please send it again.";
pub const CANCELLED: &str = "Operation cancelled.";
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
pub const SUPERSEDED: &str = "This selection was replaced by a newer file.";
pub const EXPIRED: &str = "⌛ Your file selection expired. Please send the file again.";
pub const NO_DIRECTORIES: &str = "No directories available.";

pub fn choose_directory(file_name: &str) -> String {
    format!("I received your file: {file_name}.\nPlease choose the directory to save it in:")
}

pub fn uploaded(file_name: &str, directory: &str) -> String {
    format!("✅ File {file_name} uploaded to {directory}")
}

pub fn upload_failed(error: &impl std::fmt::Display) -> String {
    format!("❌ Error uploading the file: {error}")
}

pub fn directory_creation_failed(error: &impl std::fmt::Display) -> String {
    format!("❌ Error creating the directory: {error}")
}

pub fn start(first_name: Option<&str>, authorized: bool) -> String {
    let greeting = match first_name {
        Some(name) if !name.is_empty() => format!("Hi {name}! "),
        _ => "Hi! ".to_string(),
    };
    let body = if authorized {
        "I save files to WebDAV.\n\n\
         Send me documents, photos, videos or audio and I will ask you where to save them.\n\n\
         I also receive files from configured channels and save them automatically."
    } else {
        "I save files to WebDAV.\n\nSorry, you are not authorized to use this bot directly."
    };
    format!("{greeting}{body}")
}

pub fn help(routes: &ChannelRoutes) -> String {
    let mut text = String::from(
        "📋 How to use:\n\n\
         • Send me any document, photo, video or audio.\n\
         • I will ask you where to save it.\n\
         • Pick an existing directory or create a new one.\n\n\
         🔸 Configured channels:\n",
    );
    if routes.is_empty() {
        text.push_str("• none\n");
    }
    for (chat_id, directory) in routes.iter() {
        text.push_str(&format!("• Channel {chat_id} → {directory}\n"));
    }
    text.push_str(
        "\n📝 Commands:\n\
         • /start - Start the bot\n\
         • /help - Show this help\n\
         • /list - List available directories\n\
         • /cancel - Cancel the current upload",
    );
    text
}

pub fn directory_list(directories: &[String]) -> String {
    let mut text = String::from("📁 Available directories:\n\n");
    for directory in directories {
        text.push_str(&format!("• {directory}\n"));
    }
    text
}
