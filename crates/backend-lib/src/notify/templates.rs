//! Mail subjects and bodies.
use chrono::NaiveDate;
use smartfarm_common::SuggestionRequest;

/// Subject and body of one mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

/// Password reset link mail
pub fn password_reset(reset_url: &str, valid_minutes: i64) -> Rendered {
    Rendered {
        subject: "[SmartFarm] 비밀번호 재설정".to_string(),
        body: format!(
            "비밀번호 재설정\n\
            \n\
            아래 링크를 열어 비밀번호를 재설정하세요:\n\
            {reset_url}\n\
            \n\
            이 링크는 {valid_minutes}분 동안만 유효합니다.\n\
            요청하지 않으셨다면 이 메일을 무시하세요."
        ),
    }
}

/// Email verification code mail
pub fn verification_code(code: &str, valid_minutes: i64) -> Rendered {
    Rendered {
        subject: "[SmartFarm] 이메일 인증 코드".to_string(),
        body: format!("인증 코드: {code}\n\n이 코드는 {valid_minutes}분간 유효합니다."),
    }
}

/// Suggestion-box mail delivered to the site operator
pub fn suggestion(req: &SuggestionRequest, reply_to: &str) -> Rendered {
    Rendered {
        subject: format!("[건의사항] {} - {}", req.category, req.title),
        body: format!(
            "카테고리: {}\n\
            제목: {}\n\
            내용: {}\n\
            수신받을 이메일: {reply_to}\n\
            \n\
            이 메일은 자동발송됩니다.",
            req.category, req.title, req.content
        ),
    }
}

/// Reminder that a registered item is about to expire
pub fn expiry_reminder(item_name: &str, expires_on: NaiveDate, days_left: i64) -> Rendered {
    Rendered {
        subject: format!("[알림] {item_name} 유효기간이 {days_left}일 남았습니다"),
        body: format!(
            "안녕하세요.\n\
            등록하신 \"{item_name}\"의 유효기간이 {days_left}일 남았음을 알려드립니다.\n\
            \n\
            - 품목명: {item_name}\n\
            - 유효기간: {}\n\
            \n\
            이 메일은 자동발송됩니다.",
            expires_on.format("%Y-%m-%d")
        ),
    }
}
