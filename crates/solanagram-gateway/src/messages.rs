// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing error strings.
//!
//! The platform is Italian-localized: these are the only texts that reach a
//! response body. Library internals and stack traces never do.

pub const REQUIRED_FIELDS: &str = "Tutti i campi sono obbligatori";
pub const INVALID_API_ID: &str = "Formato API ID non valido. Deve essere un numero";
pub const INVALID_PHONE: &str =
    "Formato numero di telefono non valido. Usa il formato +39xxxxxxxxx";
pub const PHONE_EXISTS: &str = "Un utente con questo numero di telefono esiste già";
pub const DB_CONNECTION_FAILED: &str = "Connessione al database fallita";
pub const TELEGRAM_CLIENT_FAILED: &str = "Impossibile inizializzare il client Telegram";
pub const API_CREDENTIALS_INVALID: &str =
    "Credenziali API Telegram non valide. Controlla API ID e API Hash su https://my.telegram.org";
pub const VERIFICATION_CODE_INVALID: &str = "Codice di verifica non valido";
pub const VERIFICATION_EXPIRED: &str =
    "Richiesta di verifica scaduta. Effettua nuovamente il login";
pub const PASSWORD_2FA_REQUIRED: &str = "Password 2FA richiesta ma non fornita";
pub const PASSWORD_2FA_INVALID: &str = "Password 2FA non valida";
pub const FLOOD_WAIT: &str = "Troppe richieste. Attendi qualche minuto prima di riprovare";
pub const UNAUTHORIZED: &str = "Autorizzazione persa. Effettua nuovamente il login";
pub const INVALID_CREDENTIALS: &str = "Numero di telefono o password non validi";
pub const API_CREDENTIALS_NOT_SET: &str = "Credenziali API non impostate per questo utente";
pub const SEND_CODE_FAILED: &str = "Errore nell'invio del codice di verifica";
pub const CONNECTION_PROBLEM: &str =
    "Problema di connessione rilevato. Riprova tra qualche istante";
pub const SYSTEM_BUSY: &str = "Sistema occupato. Riprova tra qualche istante";
pub const ALREADY_ACTIVE: &str = "Operazione già attiva per questa risorsa";
pub const NOT_FOUND: &str = "Risorsa non trovata";
pub const WORKER_LAUNCH_FAILED: &str = "Avvio del worker fallito. Riprova più tardi";
pub const WORKER_VANISHED: &str = "Il worker non è più presente";
pub const OPERATION_TIMEOUT: &str = "Operazione scaduta. Riprova";
pub const CREDENTIAL_DECRYPT_FAILED: &str =
    "Impossibile decifrare le credenziali salvate. Aggiorna le credenziali API";
pub const UNEXPECTED_ERROR: &str = "Errore inaspettato. Contatta il supporto";
pub const REGISTRATION_FAILED: &str = "Registrazione fallita. Riprova più tardi";
pub const CODE_SENT: &str = "Codice di verifica inviato";
pub const CACHED_CODE_AVAILABLE: &str = "Codice di verifica disponibile (riutilizzato da cache)";
