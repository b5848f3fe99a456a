#[cfg(test)]
use crate::core::config::MediaConfig;
#[cfg(test)]
use crate::features::auth::AuthenticatedUser;
#[cfg(test)]
use crate::shared::constants::ROLE_PLATFORM_OPERATOR;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, Router};
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use uuid::Uuid;

#[cfg(test)]
pub fn create_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        roles: vec![],
        permissions: vec![],
    }
}

#[cfg(test)]
pub fn create_operator_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        roles: vec![ROLE_PLATFORM_OPERATOR.to_string()],
        permissions: vec![],
    }
}

#[cfg(test)]
pub fn create_company_member(company_id: Uuid, access: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        roles: vec![],
        permissions: vec![format!("company:{}:{}", company_id, access)],
    }
}

#[cfg(test)]
pub fn media_config(root: &Path) -> MediaConfig {
    MediaConfig {
        root_folder: root.to_path_buf(),
        public_api_url: "https://api.example.com".to_string(),
        max_upload_size: 1024 * 1024,
    }
}

/// Make every request on `router` look authenticated as `user`
#[cfg(test)]
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}
