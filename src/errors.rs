use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法
/// - error_type() 方法
/// - message() 方法
macro_rules! define_shortspan_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum ShortspanError {
            $($variant(String),)*
        }

        impl ShortspanError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(ShortspanError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(ShortspanError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(ShortspanError::$variant(msg) => msg,)*
                }
            }
        }
    };
}

define_shortspan_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    Validation("E004", "Validation Error"),
    NotFound("E005", "Resource Not Found"),
    Serialization("E006", "Serialization Error"),
    DateParse("E007", "Date Parse Error"),
    ConfigLoad("E008", "Config Load Error"),
    PipelineClosed("E009", "Click Pipeline Closed"),
    InvoiceOperation("E010", "Invoice Operation Error"),
}

impl ShortspanError {
    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortspanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortspanError {}

// 便捷的构造函数
impl ShortspanError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortspanError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortspanError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortspanError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortspanError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortspanError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortspanError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        ShortspanError::DateParse(msg.into())
    }

    pub fn config_load<T: Into<String>>(msg: T) -> Self {
        ShortspanError::ConfigLoad(msg.into())
    }

    pub fn pipeline_closed<T: Into<String>>(msg: T) -> Self {
        ShortspanError::PipelineClosed(msg.into())
    }

    pub fn invoice_operation<T: Into<String>>(msg: T) -> Self {
        ShortspanError::InvoiceOperation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortspanError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortspanError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShortspanError {
    fn from(err: std::io::Error) -> Self {
        ShortspanError::ConfigLoad(err.to_string())
    }
}

impl From<serde_json::Error> for ShortspanError {
    fn from(err: serde_json::Error) -> Self {
        ShortspanError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for ShortspanError {
    fn from(err: chrono::ParseError) -> Self {
        ShortspanError::DateParse(err.to_string())
    }
}

impl From<toml::de::Error> for ShortspanError {
    fn from(err: toml::de::Error) -> Self {
        ShortspanError::ConfigLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortspanError>;
