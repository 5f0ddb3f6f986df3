//! The handful of informational pages. Bodies live here as plain strings per
//! locale; an unknown locale gets the default-locale text.

use bedtale_common::i18n::{self, Label};

#[derive(Clone, Copy, Debug)]
pub enum StaticPage {
    About,
    Contact,
    TermsOfUse,
    PrivacyPolicy,
}

impl StaticPage {
    pub fn heading(&self, locale: &str) -> &'static str {
        let label = match self {
            StaticPage::About => Label::About,
            StaticPage::Contact => Label::Contact,
            StaticPage::TermsOfUse => Label::TermsOfUse,
            StaticPage::PrivacyPolicy => Label::PrivacyPolicy,
        };

        i18n::label(locale, label)
    }

    pub fn body(&self, locale: &str) -> &'static str {
        match (self, locale) {
            (StaticPage::About, "ru") => {
                "Мы собираем короткие добрые сказки, которые удобно читать перед сном."
            }
            (StaticPage::About, _) => {
                "We collect short, gentle stories that are easy to read aloud before sleep."
            }
            (StaticPage::Contact, "ru") => "Напишите нам: hello@bedtale.example",
            (StaticPage::Contact, _) => "Write to us at hello@bedtale.example",
            (StaticPage::TermsOfUse, "ru") => {
                "Все сказки предназначены только для личного, некоммерческого чтения."
            }
            (StaticPage::TermsOfUse, _) => {
                "All stories are provided for personal, non-commercial reading only."
            }
            (StaticPage::PrivacyPolicy, "ru") => {
                "Сайт не собирает личные данные и не использует файлы cookie для отслеживания."
            }
            (StaticPage::PrivacyPolicy, _) => {
                "The site collects no personal data and sets no tracking cookies."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StaticPage;

    #[test]
    fn unknown_locale_gets_default_body() {
        assert_eq!(
            StaticPage::About.body("fr"),
            StaticPage::About.body("en")
        );
    }

    #[test]
    fn headings_follow_the_locale() {
        assert_eq!(StaticPage::Contact.heading("ru"), "Контакты");
        assert_eq!(StaticPage::Contact.heading("en"), "Contact");
    }
}
