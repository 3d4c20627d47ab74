use std::marker::PhantomData;

use http::{header, Request, Response, StatusCode};
use tower_http::validate_request::ValidateRequest;

/// Static bearer-token check. An empty configured token disables
/// authentication entirely.
pub struct TokenValidate<ResBody> {
    token: String,
    _ty: PhantomData<ResBody>,
}

impl<ResBody> TokenValidate<ResBody> {
    pub fn new(token: String) -> Self {
        Self {
            token,
            _ty: PhantomData,
        }
    }
}

impl<ResBody> Clone for TokenValidate<ResBody> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            _ty: PhantomData,
        }
    }
}

impl<B: Default> ValidateRequest<B> for TokenValidate<B> {
    type ResponseBody = B;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.token.is_empty() {
            return Ok(());
        }

        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token == self.token)
            .unwrap_or(false);

        if authorized {
            Ok(())
        } else {
            let mut response = Response::new(B::default());
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            Err(response)
        }
    }
}
