//! Static UI labels keyed by an enum instead of dotted string paths, so a
//! missing label is a compile error and an unknown locale falls back to the
//! default instead of leaking a raw key into the page.

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    SiteName,
    Tagline,
    Home,
    Stories,
    AllStories,
    Search,
    SearchPlaceholder,
    SearchNoResults,
    BrowseAll,
    ReadingMinutes,
    AgeGroup,
    About,
    Contact,
    TermsOfUse,
    PrivacyPolicy,
    StoryNotFound,
}

/// Resolves a label for a locale, falling back to [`DEFAULT_LOCALE`] when the
/// locale has no entry.
pub fn label(locale: &str, label: Label) -> &'static str {
    lookup(locale, label).unwrap_or_else(|| english(label))
}

fn english(label: Label) -> &'static str {
    use Label::*;

    match label {
        SiteName => "Bedtime Tales",
        Tagline => "Short stories for sleepy heads",
        Home => "Home",
        Stories => "Stories",
        AllStories => "All stories",
        Search => "Search",
        SearchPlaceholder => "Search stories...",
        SearchNoResults => "Nothing found",
        BrowseAll => "Browse all stories",
        ReadingMinutes => "min read",
        AgeGroup => "Ages",
        About => "About",
        Contact => "Contact",
        TermsOfUse => "Terms of use",
        PrivacyPolicy => "Privacy policy",
        StoryNotFound => "This story could not be found",
    }
}

fn lookup(locale: &str, label: Label) -> Option<&'static str> {
    use Label::*;

    match locale {
        "en" => Some(english(label)),
        "ru" => Some(match label {
            SiteName => "Сказки на ночь",
            Tagline => "Короткие сказки перед сном",
            Home => "Главная",
            Stories => "Сказки",
            AllStories => "Все сказки",
            Search => "Поиск",
            SearchPlaceholder => "Поиск сказок...",
            SearchNoResults => "Ничего не найдено",
            BrowseAll => "Смотреть все сказки",
            ReadingMinutes => "мин чтения",
            AgeGroup => "Возраст",
            About => "О нас",
            Contact => "Контакты",
            TermsOfUse => "Условия использования",
            PrivacyPolicy => "Политика конфиденциальности",
            StoryNotFound => "Сказка не найдена",
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{label, Label, DEFAULT_LOCALE};

    #[test]
    fn known_locale_resolves() {
        assert_eq!(label("ru", Label::Stories), "Сказки");
    }

    #[test]
    fn unknown_locale_falls_back_to_default() {
        assert_eq!(label("fr", Label::Stories), label(DEFAULT_LOCALE, Label::Stories));
        assert_eq!(label("", Label::SiteName), "Bedtime Tales");
    }
}
