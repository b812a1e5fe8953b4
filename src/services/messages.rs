//! User-facing texts in the two supported languages

use crate::models::{Language, LogoutReason, ParsedEquipment};

/// Message shown on the login view after a forced logout
pub fn logout_message(reason: LogoutReason, language: Language) -> &'static str {
    match (language, reason) {
        (Language::Id, LogoutReason::Expired) => "Sesi Anda telah berakhir. Silakan login kembali.",
        (Language::Id, LogoutReason::IdleTimeout) => {
            "Anda keluar otomatis karena tidak ada aktivitas. Silakan login kembali."
        }
        (Language::Id, LogoutReason::RefreshFailed) => {
            "Gagal memperpanjang sesi. Silakan login kembali."
        }
        (Language::Id, LogoutReason::NoToken) => "Sesi tidak ditemukan. Silakan login.",
        (Language::Id, LogoutReason::InvalidToken) => "Sesi tidak valid. Silakan login kembali.",
        (Language::Id, LogoutReason::UserLogout) => "Anda telah keluar.",
        (Language::En, LogoutReason::Expired) => "Your session has expired. Please log in again.",
        (Language::En, LogoutReason::IdleTimeout) => {
            "You were logged out after a period of inactivity. Please log in again."
        }
        (Language::En, LogoutReason::RefreshFailed) => {
            "Your session could not be renewed. Please log in again."
        }
        (Language::En, LogoutReason::NoToken) => "No session found. Please log in.",
        (Language::En, LogoutReason::InvalidToken) => "Your session is invalid. Please log in again.",
        (Language::En, LogoutReason::UserLogout) => "You have been logged out.",
    }
}

/// Renewal prompt text
pub fn expiry_warning(minutes_left: i64, language: Language) -> String {
    let minutes = minutes_left.max(1);
    match language {
        Language::Id => format!(
            "Sesi Anda akan berakhir dalam {minutes} menit. Perpanjang sesi untuk tetap login."
        ),
        Language::En => format!(
            "Your session expires in {minutes} minute(s). Renew it to stay logged in."
        ),
    }
}

pub fn renewal_succeeded(language: Language) -> &'static str {
    match language {
        Language::Id => "Sesi berhasil diperpanjang.",
        Language::En => "Session renewed.",
    }
}

pub fn renewal_failed(language: Language) -> &'static str {
    match language {
        Language::Id => "Gagal memperpanjang sesi. Anda akan keluar.",
        Language::En => "Could not renew the session. You will be logged out.",
    }
}

/// Toast after a successful decode
pub fn scan_succeeded(parsed: &ParsedEquipment, language: Language) -> String {
    match language {
        Language::Id => format!("Barcode terbaca: {}", parsed.summary()),
        Language::En => format!("Barcode scanned: {}", parsed.summary()),
    }
}
