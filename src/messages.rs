//! Fixed user-facing strings. The service speaks Arabic to its users.

/// Reply to a message caught by the content filter.
pub const DEFLECTION: &str = "أعتذر، أنا هنا لمساعدتك فقط. كيف يمكنني خدمتك؟";

/// Reply when no regulation has been uploaded yet.
pub const NOT_INDEXED: &str = "لم يتم رفع الأنظمة بعد. راجع المسؤول.";

/// Reply when retrieval or generation fails.
pub const GENERIC_APOLOGY: &str = "عذراً، حدث خطأ. تأكد من إعداد OpenAI API Key.";

/// Rejection of an empty chat message.
pub const EMPTY_MESSAGE: &str = "الرجاء كتابة سؤالك.";

pub const UPLOAD_OK: &str = "تم الرفع بنجاح";

pub const PDF_ONLY: &str = "PDF فقط";

pub const MISSING_FILE: &str = "لم يتم إرفاق ملف";

pub const DELETED: &str = "تم الحذف";

/// Closing line every generated answer must end with.
pub const FOLLOW_UP: &str = "هل لديك استفسار آخر؟";
