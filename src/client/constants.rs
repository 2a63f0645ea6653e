// Endpoints
pub const USERS_ENDPOINT: &str = "/users";
pub const USERS_REGISTER_ENDPOINT: &str = "/users/register";
pub const USERS_LOGIN_ENDPOINT: &str = "/users/login";
pub const USERS_ME_ENDPOINT: &str = "/users/me";
pub const USERS_UPDATE_PWD_ENDPOINT: &str = "/users/update-pwd";
pub const USERS_UPDATE_PWD_ADMIN_ENDPOINT: &str = "/users/update-pwd-admin";
pub const USERS_UPDATE_ROLE_ENDPOINT: &str = "/users/update-role";
pub const USERS_UPDATE_AVATAR_ENDPOINT: &str = "/users/update-avatar";
pub const CATEGORIES_ENDPOINT: &str = "/categories";
pub const EXPENSES_ENDPOINT: &str = "/expenses";
pub const MESSAGES_ENDPOINT: &str = "/messages";

// Token persistence
pub const TOKEN_FILE_DEFAULT: &str = ".expensio_token.json";
pub const TOKEN_TTL_DAYS: i64 = 7;

// Validation
pub const PASSWORD_MIN_LEN: usize = 6;

// Pagination
pub const EXPENSES_PAGE_LIMIT_DEFAULT: u32 = 10;
