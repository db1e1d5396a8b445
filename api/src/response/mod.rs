use serde::Serialize;

/// Standard JSON envelope for every route except check-in.
///
/// ```json
/// {
///   "success": true,
///   "data": { "id": 7, "code": "CS204" },
///   "message": "Course created"
/// }
/// ```
///
/// Error responses carry `T::default()` as `data`:
///
/// ```json
/// {
///   "success": false,
///   "data": null,
///   "message": "Course not found"
/// }
/// ```
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response with default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}

/// Placeholder payload for responses that carry no data.
#[derive(Serialize, Default)]
pub struct Empty;
