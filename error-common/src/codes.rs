// Error codes implementation
// Stable codes for the Identifo engine; specific codes stay in server logs,
// only the generic ones are sent to clients.

pub mod authentication {
    pub const AUTHENTICATION_FAILED: &str = "AUTH_2001";
    pub const INVALID_CREDENTIALS: &str = "AUTH_2002";
}

pub mod token {
    pub const EMPTY_TOKEN: &str = "TOKEN_2101";
    pub const MALFORMED_TOKEN: &str = "TOKEN_2102";
    pub const TOKEN_INVALID: &str = "TOKEN_2103";
}

pub mod validation {
    pub const TOKEN_EXPIRED: &str = "VALIDATION_2201";
    pub const MISSING_ISSUED_AT: &str = "VALIDATION_2202";
    pub const INVALID_AUDIENCE: &str = "VALIDATION_2203";
    pub const INVALID_ISSUER: &str = "VALIDATION_2204";
    pub const INVALID_SUBJECT: &str = "VALIDATION_2205";
    pub const TOKEN_TYPE_MISMATCH: &str = "VALIDATION_2206";
}

pub mod issuance {
    pub const INVALID_APP: &str = "ISSUANCE_3001";
    pub const INVALID_USER: &str = "ISSUANCE_3002";
    pub const INVALID_OFFLINE_SCOPE: &str = "ISSUANCE_3003";
    pub const HASH_PARAMS_MISSING: &str = "ISSUANCE_3004";
}

pub mod password {
    pub const UNKNOWN_HASH_TYPE: &str = "PASSWORD_3101";
    pub const INCOMPATIBLE_ARGON_VERSION: &str = "PASSWORD_3102";
    pub const INVALID_HASH: &str = "PASSWORD_3103";
}

pub mod configuration {
    pub const KEY_FILE_NOT_FOUND: &str = "CONFIG_5001";
    pub const UNSUPPORTED_SIGNATURE_ALGORITHM: &str = "CONFIG_5002";
    pub const KEY_PARSE_FAILED: &str = "CONFIG_5003";
    pub const INVALID_SETTING: &str = "CONFIG_5004";
}

pub mod storage {
    pub const SAVING_TOKEN: &str = "STORAGE_4001";
    pub const NOT_FOUND: &str = "STORAGE_4002";
    pub const BACKEND: &str = "STORAGE_4003";
}

pub mod internal {
    pub const INTERNAL: &str = "SYSTEM_9001";
}
