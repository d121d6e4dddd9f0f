use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::user::UpdateProfileDto;

/// Self-service profile update. Omitted fields stay unchanged.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub last_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub middle_name: Option<String>,
    /// Required together with `new_password`.
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl From<UpdateProfileRequest> for UpdateProfileDto {
    fn from(r: UpdateProfileRequest) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            middle_name: r.middle_name,
            current_password: non_empty(r.current_password),
            new_password: non_empty(r.new_password),
        }
    }
}

/// Multipart form with a single `avatar` file part.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AvatarForm {
    #[schema(format = Binary, value_type = String)]
    pub avatar: Vec<u8>,
}
